mod arche;
mod component;
mod entity;
mod listener;
mod monitor;
mod query;
