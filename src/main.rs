/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::fs;
use std::rc::Rc;
use std::str::FromStr;

use anyhow::Context;
use clap::Parser;
use log::{error, info, LevelFilter};

use layeredconf::backend::Registry;
use layeredconf::crypto::{Base64XorCrypto, Crypto};
use layeredconf::cursor::{Cursor, Flags};
use layeredconf::event_loop::QueueEventLoop;
use layeredconf::resolver::EnvResolver;
use layeredconf::saver::Saver;
use layeredconf::source_cache::SourceCache;
use layeredconf::value::Value;

mod args;
mod config;

use args::{Args, Command};
use config::DemoConfig;

fn main() {
    let status = run();
    if let Err(ref err) = status {
        error!("{:?}", err);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let args = Args::parse();

    let config: DemoConfig = match fs::read_to_string(&args.config_path) {
        Ok(contents) => toml::from_str(&contents).with_context(|| "failed to parse configuration")?,
        Err(_) => DemoConfig::default(),
    };

    log4rs::init_file("log4rs.yml", Default::default()).with_context(|| "failed to init logger")?;
    if let Some(level) = &config.log_level {
        let level = LevelFilter::from_str(level).with_context(|| format!("invalid log_level '{}'", level))?;
        log::set_max_level(level);
    }
    info!("init logger");

    let resolver = EnvResolver::new();
    let registry = Registry::with_defaults();
    let cache = SourceCache::new();
    let event_loop = Rc::new(QueueEventLoop::new());
    let saver = Rc::new(Saver::new(event_loop.clone()));
    let crypto: Option<Rc<dyn Crypto>> = Some(Rc::new(Base64XorCrypto::new(config.crypto_key.clone())));

    info!("open store '{}' (system-only: {})", args.store, args.system);
    let cursor = if args.system {
        Cursor::open_system_only(&[&args.store], false, &resolver, &registry, &cache, saver, crypto)
            .with_context(|| format!("failed to open store '{}' against the system directory", args.store))?
    } else {
        Cursor::open(
            &[&args.store],
            Vec::new(),
            true,
            &resolver,
            &registry,
            &cache,
            saver,
            crypto,
        )
        .with_context(|| format!("failed to open store '{}'", args.store))?
    };

    match args.command {
        Command::Get { key } => {
            let value = cursor.value(&key, Value::Null, Flags::NORMAL);
            println!("{:?}", value);
        }
        Command::Set { key, value, secret } => {
            let flags = if secret { Flags::CRYPTED } else { Flags::NORMAL };
            cursor.set_value(&key, Value::str(value), flags);
        }
        Command::Remove { key } => {
            let removed = cursor.remove(&key);
            println!("removed: {}", removed);
        }
        Command::List { group } => {
            if group.is_empty() {
                print_children(&cursor);
            } else {
                cursor.begin_group(&group);
                print_children(&cursor);
                cursor.end_group();
            }
        }
        Command::Sync => {
            cursor.sync();
        }
    }

    drop(cursor);
    event_loop.drain();
    info!("shutdown drain complete");
    Ok(())
}

fn print_children(cursor: &Cursor) {
    for group in cursor.child_groups() {
        println!("{}/", group);
    }
    for key in cursor.child_keys() {
        println!("{}", key);
    }
}
