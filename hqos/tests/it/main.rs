mod marking;
mod priority;
mod scenario;
