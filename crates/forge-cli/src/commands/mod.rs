pub mod assemble;
pub mod check;
pub mod configure;
pub mod publications;
pub mod publish;
pub mod tasks;
