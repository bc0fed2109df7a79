mod repositories;

pub use repositories::{
    ChatRepository, FriendshipRepository, MessageQuery, MessageRepository, RepoResult,
    UserRepository,
};
