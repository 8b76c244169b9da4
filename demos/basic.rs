use marvel_http::{ApiEnvelope, DataContainer, MarvelClient, RequestDescriptor};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Character {
    id: u64,
    name: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let public_key = std::env::var("MARVEL_PUBLIC_KEY")?;
    let private_key = std::env::var("MARVEL_PRIVATE_KEY")?;

    let client = MarvelClient::new(public_key, private_key)?;

    let health = client.health_check().await?;
    println!("health: {}", serde_json::to_string(&health)?);
    if !health.is_ok() {
        client.close();
        return Ok(());
    }

    let page: ApiEnvelope<DataContainer<Character>> = client
        .request_json(
            &RequestDescriptor::get("/v1/public/characters")
                .query("nameStartsWith", "Spider")
                .limit(5),
        )
        .await?;
    for character in &page.data.results {
        println!("{:>8}  {}", character.id, character.name);
    }
    println!("{} of {} characters", page.data.count, page.data.total);

    let comics = client
        .request(&RequestDescriptor::related("/v1/public/characters", 1009610, "comics").limit(3))
        .await?;
    println!("comics: {}", comics["data"]["total"]);

    client.close();
    Ok(())
}
