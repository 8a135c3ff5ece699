use super::Context;
use anyhow::{bail, Result};
use chrono::Utc;
use clap::Subcommand;
use recap_core::{AuthorizedToken, InstalledAppFlow, TokenClient};

#[derive(Subcommand, Debug)]
pub enum AuthCommands {
    /// Run the browser consent flow and write <channel>_token.json
    Login {
        #[clap(long)]
        channel: Option<String>,

        #[clap(long, help = "Print the consent URL without opening a browser")]
        no_browser: bool,

        #[clap(long, help = "Port for the local redirect listener (0 picks a free one)")]
        port: Option<u16>,
    },
    /// Exchange the stored refresh token for a new access token
    Refresh {
        #[clap(long)]
        channel: Option<String>,
    },
    /// Show what the stored token grants and whether it is still valid
    Status {
        #[clap(long)]
        channel: Option<String>,
    },
}

pub async fn handle(ctx: &Context, action: AuthCommands) -> Result<()> {
    match action {
        AuthCommands::Login {
            channel,
            no_browser,
            port,
        } => {
            let channel = ctx.channel(channel.as_deref())?;
            let mut settings = ctx.config.oauth.clone();
            if no_browser {
                settings.open_browser = false;
            }
            if let Some(port) = port {
                settings.redirect_port = port;
            }

            let flow = InstalledAppFlow::new(settings, ctx.layout())?;
            let token_path = flow.run(&channel).await?;
            println!("Token written to {}", token_path.display());
            println!("Next: `recap secrets export --channel {}` to publish it to the repository.", channel);
        }
        AuthCommands::Refresh { channel } => {
            let channel = ctx.channel(channel.as_deref())?;
            let path = ctx.layout().token_path(&channel);
            let token = AuthorizedToken::from_file(&path).await?;

            let refreshed = TokenClient::new()?.refresh(&token).await?;
            refreshed.save(&path).await?;
            match refreshed.expiry {
                Some(expiry) => println!("Refreshed {}; valid until {}", path.display(), expiry),
                None => println!("Refreshed {}", path.display()),
            }
            if refreshed.refresh_token != token.refresh_token {
                println!("The refresh token was rotated; update the TOKEN_JSON secret.");
            }
        }
        AuthCommands::Status { channel } => {
            let channel = ctx.channel(channel.as_deref())?;
            let path = ctx.layout().token_path(&channel);
            if !path.is_file() {
                bail!(
                    "No token at {}; run `recap auth login --channel {}`",
                    path.display(),
                    channel
                );
            }
            let token = AuthorizedToken::from_file(&path).await?;

            println!("Token file:    {}", path.display());
            println!("Client ID:     {}", token.client_id);
            println!("Scopes:        {}", token.scopes.join(" "));
            match token.expiry {
                Some(expiry) if token.is_expired(Utc::now()) => {
                    println!("Access token:  expired at {}", expiry)
                }
                Some(expiry) => println!("Access token:  valid until {}", expiry),
                None => println!("Access token:  no expiry recorded"),
            }
            println!(
                "Refreshable:   {}",
                if token.can_refresh() { "yes" } else { "no" }
            );
        }
    }
    Ok(())
}
