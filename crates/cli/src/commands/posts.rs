//! Posts command - inspect stored posts

use anyhow::{Context, Result};
use std::path::PathBuf;
use tootbridge_domain::{Post, usecases::read_snapshot};

use crate::args::{PostsArgs, PostsCommands};
use crate::commands::build_store;
use crate::config::AppConfig;

pub async fn execute(args: PostsArgs, config_path: Option<PathBuf>) -> Result<()> {
    match args.command {
        PostsCommands::List { json } => list_posts(json, config_path).await,
    }
}

async fn list_posts(json: bool, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;
    let store = build_store(&config, false).await?;

    let snapshot = read_snapshot(store.as_ref())
        .await
        .context("Failed to read store")?;

    if json {
        let output = serde_json::json!({
            "posts": snapshot.posts.iter().map(|p| serde_json::json!({
                "id": p.id,
                "url": p.url,
                "text": p.text,
                "state": p.state(),
            })).collect::<Vec<_>>(),
            "archived": snapshot.archived,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("Posts ({} pending)", snapshot.posts.len());
    println!("=================");
    println!();
    for post in &snapshot.posts {
        print_post(post, &format!("{:?}", post.state()));
    }

    println!("Archive ({} published)", snapshot.archived.len());
    println!("=====================");
    println!();
    for post in &snapshot.archived {
        print_post(post, "Published");
    }

    Ok(())
}

fn print_post(post: &Post, state: &str) {
    println!("ID: {} [{}]", post.id, state);
    println!("  URL: {}", post.url);
    if let Some(ref text) = post.text {
        println!("  Text: {}", text);
    }
    println!();
}
