//! Mutation operations, split by flow.

mod action_errors;
mod reassign;
