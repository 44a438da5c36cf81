mod dump;
mod errors;
mod help;
mod layered;
