pub mod ip_config;
pub mod login;
pub mod song_list;
pub mod song_view;
