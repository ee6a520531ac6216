mod fixtures;
mod processor_tests;
mod resource_tally_tests;
