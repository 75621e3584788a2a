pub mod reissner_nordstrom;
