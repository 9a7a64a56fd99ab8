//! Integration tests for model transformations.

mod convert_function_types;
mod io;
mod type_copier;
