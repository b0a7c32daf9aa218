pub mod bedrock;

pub use bedrock::BedrockConverse;
