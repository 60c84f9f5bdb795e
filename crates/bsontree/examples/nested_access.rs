//! Example of walking a decoded document with the cursor.
//!
//! cargo run --package bsontree --example nested_access

use bsontree::{Document, decode, encode, from_json};

#[derive(Debug)]
struct User {
    name: String,
}

fn main() -> Result<(), bsontree::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let authored = from_json(
        r#"{"users": [{"$guid": "u-amy", "$type": "User", "name": "Amy"},
                      {"$guid": "u-bob", "$type": "User", "name": "Bob"}],
            "admin": {"$ref": "u-bob"}}"#,
    )?;
    let bytes = encode(&authored)?;
    let mut doc = decode(&bytes)?;

    doc.register_constructor("User", |doc: &mut Document| User {
        name: doc.get_value("name").to_owned(),
    });

    // root["users"][1]["name"]
    if doc.set_to("users") && doc.set_to_index(1) {
        println!("second user: {}", doc.get_value("name"));
        doc.set_to_root();
    }

    let admin = doc.get_identifier("admin").to_owned();
    if let Some(user) = doc.get_constructed_object::<User>(&admin) {
        println!("admin: {} ({} bytes on the wire)", user.name, bytes.len());
    }
    Ok(())
}
