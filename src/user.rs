/// A mini struct for holding only what information we need about a client.
#[derive(Clone, Debug)]
pub struct ClientUser {
    pub id: i32,
    pub name: String,
}
