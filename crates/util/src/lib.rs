pub mod by_ptr;
