pub mod factory;
pub mod http;
pub mod llm;
pub mod tools;
