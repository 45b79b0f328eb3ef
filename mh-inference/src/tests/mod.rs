//! End-to-end tests that assemble small bodies by hand, run the
//! interpreter over them, and check the inferred facts and reported
//! problems.


mod test_foreign_layouts;
mod test_handle_factories;
mod test_merging_combinators;
mod test_method_types;
