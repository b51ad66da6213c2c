pub mod category;
pub mod city;
pub mod country;
pub mod district;
pub mod region;
pub mod state;
pub mod sub_category;
