mod catalog;
mod config;
mod extract;
mod properties;
mod specialize;
mod validate;
