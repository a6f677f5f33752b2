mod download;
mod health;
mod login;
mod pages;
mod upload;

pub use download::{download, download_empty};
pub use health::health;
pub use login::{login, login_page};
pub use pages::index;
pub use upload::upload;
