//! `invctl user …`

use std::io::Write;

use doc_store::DocumentStore;
use domain::{DomainError, NewUser, UserId};

use crate::app::App;
use crate::args::UserCommand;
use crate::error::CliError;
use crate::render;

pub async fn run<S>(app: &App<S>, command: UserCommand, out: &mut dyn Write) -> Result<(), CliError>
where
    S: DocumentStore + Clone,
{
    let user = match command {
        UserCommand::Add { name, email } => app.users.create(NewUser::new(name, email)).await?,
        UserCommand::Show { user } => match user.parse::<UserId>() {
            Ok(id) => app.users.get(id).await?,
            Err(_) => app
                .users
                .find_by_email(&user)
                .await?
                .ok_or_else(|| DomainError::not_found("user", &user))?,
        },
    };
    render::user(out, &user)?;
    Ok(())
}
