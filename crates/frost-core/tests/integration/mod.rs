mod full_flow_test;
mod persistence_test;
