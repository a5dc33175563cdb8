mod feed_cycle;
mod runner;
