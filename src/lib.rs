pub mod config;
pub mod llm;
pub mod logging;
pub mod progress;
pub mod runner;
pub mod tools;
pub mod workflows;

#[cfg(test)]
mod test_support;
