mod ping;
mod psync;
mod replconf;
