pub mod config;
pub mod ctrl;
pub mod emu;
pub mod net;
pub mod sim;
pub mod topo;

#[cfg(test)]
mod test;
