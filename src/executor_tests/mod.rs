mod abstract_types;
mod basics;
mod directives;
mod errors;
mod extensions;
mod support;
mod variables;
