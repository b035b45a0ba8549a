// almod — abstraction-layer model modifier
//
// Library root. Models are parsed from component definitions, validated,
// and transformed in place by the modifier passes.

pub mod ast;
pub mod diag;
pub mod flat;
pub mod id;
pub mod lexer;
pub mod modifier;
pub mod parser;
pub mod pipeline;
pub mod print;
pub mod query;
pub mod substitute;
pub mod validate;
pub mod visit;
