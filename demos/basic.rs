use dbfx::{EngineClient, ErrorCode, Sql, Value};
use serde_json::json;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let engine = EngineClient::from_env().map_err(anyhow::Error::msg)?;
    let users = engine.effectful("User");

    match users
        .create_effect(json!({ "data": { "email": "kit@example.com", "name": "Kit" } }))
        .await
    {
        Ok(user) => println!("created {user}"),
        Err(err) if err.code() == ErrorCode::UniqueConstraintViolation => {
            println!("already exists: {:?}", err.meta().get("target"));
        }
        Err(err) => return Err(err.into()),
    }

    match users
        .find_unique_effect(json!({ "where": { "email": "kit@example.com" } }))
        .await?
    {
        Some(user) => println!("found {user}"),
        None => println!("no such user"),
    }

    let touched = engine
        .raw_effectful()
        .execute_raw_effect(Sql::new(
            "UPDATE \"User\" SET name = ? WHERE email = ?",
            [Value::text("Kitty"), Value::text("kit@example.com")],
        ))
        .await?;
    println!("renamed {touched} row(s)");

    Ok(())
}
