//! Cross-module tests: predictions in, pixels and scrub behavior out.
