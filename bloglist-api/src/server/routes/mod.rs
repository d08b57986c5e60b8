use crate::server::ServerRouter;

mod login;
mod posts;
mod users;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .merge(posts::routes())
        .merge(users::routes())
        .merge(login::routes())
}
