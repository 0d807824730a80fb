pub mod adapters;
pub mod app;
pub mod domain;
pub mod viewer;

#[cfg(test)]
mod test_support;
