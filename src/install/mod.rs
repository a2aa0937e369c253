pub mod executable;
