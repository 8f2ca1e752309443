pub mod fake_pool;
