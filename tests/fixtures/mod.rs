pub mod sample_grids;
