mod pagination;
mod schema;
mod search;
mod writers;
