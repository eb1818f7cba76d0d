mod func;
mod indexing;
