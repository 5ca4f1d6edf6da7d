pub mod encoded_key;
pub mod table;
pub mod tile_group;
