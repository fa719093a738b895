mod model;
mod repository;

pub use model::UserChannelDB;
pub use repository::ChannelRepository;
