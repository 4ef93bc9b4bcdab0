mod client;
mod connection;
mod events;
mod pending;
