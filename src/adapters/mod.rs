pub mod api;
pub mod cad_cloud;
pub mod credentials;
pub mod upstream;
