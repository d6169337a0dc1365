mod sale;

pub use sale::*;
