use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use redis::{AsyncCommands, Client, Script};

use crate::models::{HardwareSet, Project, User};
use crate::services::store::{Reserve, Restocked, Store, StoreError, StoreResult};

// Scripts return {code, ...}: 0 on success, -1 when a guard failed, -2 when
// the document does not exist. Each script is one atomic step on the server.
const RESERVE_SCRIPT: &str = r#"
local avail = redis.call('HGET', KEYS[1], 'available')
if not avail then return {-2, 0} end
avail = tonumber(avail)
local amount = tonumber(ARGV[1])
if avail < amount then return {-1, avail} end
local new = redis.call('HINCRBY', KEYS[1], 'available', -amount)
return {0, new}
"#;

const RESTOCK_SCRIPT: &str = r#"
local avail = redis.call('HGET', KEYS[1], 'available')
if not avail then return {-2, 0, 0} end
avail = tonumber(avail)
local cap = tonumber(redis.call('HGET', KEYS[1], 'capacity'))
local new = avail + tonumber(ARGV[1])
if new > cap then new = cap end
redis.call('HSET', KEYS[1], 'available', new)
return {0, new, new - avail}
"#;

const ADJUST_SCRIPT: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 0 then return {-2, 0} end
local cur = tonumber(redis.call('HGET', KEYS[2], ARGV[1]) or '0')
local new = cur + tonumber(ARGV[2])
if new < 0 then new = 0 end
redis.call('HSET', KEYS[2], ARGV[1], new)
return {0, new}
"#;

/// Redis-backed store. Documents live in hashes so single fields can move
/// atomically (HINCRBY for counters, Lua for the guarded pool updates);
/// membership and index listings are sets; tokens are plain keys with a TTL.
pub struct RedisStore {
    client: Arc<Client>,
    reserve: Script,
    restock: Script,
    adjust: Script,
}

impl RedisStore {
    pub fn new(client: Arc<Client>) -> Self {
        Self {
            client,
            reserve: Script::new(RESERVE_SCRIPT),
            restock: Script::new(RESTOCK_SCRIPT),
            adjust: Script::new(ADJUST_SCRIPT),
        }
    }

    async fn conn(&self) -> StoreResult<redis::aio::Connection> {
        Ok(self.client.get_async_connection().await?)
    }
}

impl Clone for RedisStore {
    fn clone(&self) -> Self {
        Self::new(self.client.clone())
    }
}

fn user_key(username: &str) -> String {
    format!("user:{}", username)
}

fn hwset_key(name: &str) -> String {
    format!("hwset:{}", name)
}

fn project_key(id: &str) -> String {
    format!("project:{}", id)
}

fn members_key(id: &str) -> String {
    format!("project:{}:members", id)
}

fn allocations_key(id: &str) -> String {
    format!("project:{}:hardware", id)
}

fn token_key(token: &str) -> String {
    format!("token:{}", token)
}

fn field<'a>(map: &'a HashMap<String, String>, name: &str) -> StoreResult<&'a str> {
    map.get(name)
        .map(String::as_str)
        .ok_or_else(|| StoreError::Corrupt(format!("missing field {}", name)))
}

fn int_field(map: &HashMap<String, String>, name: &str) -> StoreResult<i64> {
    field(map, name)?
        .parse()
        .map_err(|_| StoreError::Corrupt(format!("non-numeric field {}", name)))
}

#[async_trait]
impl Store for RedisStore {
    async fn get_user(&self, username: &str) -> StoreResult<Option<User>> {
        let mut conn = self.conn().await?;
        let map: HashMap<String, String> = conn.hgetall(user_key(username)).await?;
        if map.is_empty() {
            return Ok(None);
        }
        Ok(Some(User {
            username: field(&map, "username")?.to_string(),
            password_hash: field(&map, "password_hash")?.to_string(),
            project_seq: int_field(&map, "project_seq")? as u64,
        }))
    }

    async fn insert_user(&self, user: &User) -> StoreResult<bool> {
        let mut conn = self.conn().await?;
        let key = user_key(&user.username);
        // HSETNX on the key field doubles as the duplicate guard
        let created: bool = redis::cmd("HSETNX")
            .arg(&key)
            .arg("username")
            .arg(&user.username)
            .query_async(&mut conn)
            .await?;
        if !created {
            return Ok(false);
        }
        let _: () = conn
            .hset_multiple(
                &key,
                &[
                    ("password_hash", user.password_hash.as_str()),
                    ("project_seq", user.project_seq.to_string().as_str()),
                ],
            )
            .await?;
        Ok(true)
    }

    async fn next_project_seq(&self, username: &str) -> StoreResult<Option<u64>> {
        let mut conn = self.conn().await?;
        let key = user_key(username);
        let exists: bool = conn.exists(&key).await?;
        if !exists {
            return Ok(None);
        }
        let seq: i64 = conn.hincr(&key, "project_seq", 1).await?;
        Ok(Some(seq as u64))
    }

    async fn get_hardware_set(&self, name: &str) -> StoreResult<Option<HardwareSet>> {
        let mut conn = self.conn().await?;
        let map: HashMap<String, String> = conn.hgetall(hwset_key(name)).await?;
        if map.is_empty() {
            return Ok(None);
        }
        Ok(Some(HardwareSet {
            name: field(&map, "name")?.to_string(),
            available: int_field(&map, "available")?,
            capacity: int_field(&map, "capacity")?,
        }))
    }

    async fn insert_hardware_set(&self, set: &HardwareSet) -> StoreResult<bool> {
        let mut conn = self.conn().await?;
        let key = hwset_key(&set.name);
        let created: bool = redis::cmd("HSETNX")
            .arg(&key)
            .arg("name")
            .arg(&set.name)
            .query_async(&mut conn)
            .await?;
        if !created {
            return Ok(false);
        }
        let _: () = conn
            .hset_multiple(
                &key,
                &[
                    ("available", set.available.to_string().as_str()),
                    ("capacity", set.capacity.to_string().as_str()),
                ],
            )
            .await?;
        let _: () = conn.sadd("hwsets", &set.name).await?;
        Ok(true)
    }

    async fn list_hardware_sets(&self) -> StoreResult<Vec<HardwareSet>> {
        let mut conn = self.conn().await?;
        let names: Vec<String> = conn.smembers("hwsets").await?;
        drop(conn);
        let mut sets = Vec::with_capacity(names.len());
        for name in names {
            if let Some(set) = self.get_hardware_set(&name).await? {
                sets.push(set);
            }
        }
        Ok(sets)
    }

    async fn reserve(&self, name: &str, amount: i64) -> StoreResult<Reserve> {
        let mut conn = self.conn().await?;
        let reply: Vec<i64> = self
            .reserve
            .key(hwset_key(name))
            .arg(amount)
            .invoke_async(&mut conn)
            .await?;
        match reply.as_slice() {
            [0, available] => Ok(Reserve::Reserved {
                available: *available,
            }),
            [-1, available] => Ok(Reserve::Insufficient {
                available: *available,
            }),
            [-2, _] => Ok(Reserve::Missing),
            other => Err(StoreError::Corrupt(format!(
                "unexpected reserve reply {:?}",
                other
            ))),
        }
    }

    async fn restock(&self, name: &str, amount: i64) -> StoreResult<Option<Restocked>> {
        let mut conn = self.conn().await?;
        let reply: Vec<i64> = self
            .restock
            .key(hwset_key(name))
            .arg(amount)
            .invoke_async(&mut conn)
            .await?;
        match reply.as_slice() {
            [0, available, added] => Ok(Some(Restocked {
                available: *available,
                added: *added,
            })),
            [-2, _, _] => Ok(None),
            other => Err(StoreError::Corrupt(format!(
                "unexpected restock reply {:?}",
                other
            ))),
        }
    }

    async fn get_project(&self, id: &str) -> StoreResult<Option<Project>> {
        let mut conn = self.conn().await?;
        let map: HashMap<String, String> = conn.hgetall(project_key(id)).await?;
        if map.is_empty() {
            return Ok(None);
        }
        let members: Vec<String> = conn.smembers(members_key(id)).await?;
        let raw: HashMap<String, String> = conn.hgetall(allocations_key(id)).await?;
        let mut hardware = std::collections::BTreeMap::new();
        for (name, units) in raw {
            let units = units
                .parse()
                .map_err(|_| StoreError::Corrupt(format!("non-numeric allocation for {}", name)))?;
            hardware.insert(name, units);
        }
        Ok(Some(Project {
            id: field(&map, "id")?.to_string(),
            name: field(&map, "name")?.to_string(),
            description: field(&map, "description")?.to_string(),
            members: members.into_iter().collect(),
            hardware,
        }))
    }

    async fn insert_project(&self, project: &Project) -> StoreResult<bool> {
        let mut conn = self.conn().await?;
        let key = project_key(&project.id);
        let created: bool = redis::cmd("HSETNX")
            .arg(&key)
            .arg("id")
            .arg(&project.id)
            .query_async(&mut conn)
            .await?;
        if !created {
            return Ok(false);
        }
        let _: () = conn
            .hset_multiple(
                &key,
                &[
                    ("name", project.name.as_str()),
                    ("description", project.description.as_str()),
                ],
            )
            .await?;
        for member in &project.members {
            let _: () = conn.sadd(members_key(&project.id), member).await?;
        }
        for (name, units) in &project.hardware {
            let _: () = conn
                .hset(allocations_key(&project.id), name, *units)
                .await?;
        }
        let _: () = conn.sadd("projects", &project.id).await?;
        Ok(true)
    }

    async fn list_projects(&self) -> StoreResult<Vec<Project>> {
        let mut conn = self.conn().await?;
        let ids: Vec<String> = conn.smembers("projects").await?;
        drop(conn);
        let mut projects = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(project) = self.get_project(&id).await? {
                projects.push(project);
            }
        }
        Ok(projects)
    }

    async fn adjust_allocation(
        &self,
        project_id: &str,
        hwset: &str,
        delta: i64,
    ) -> StoreResult<Option<i64>> {
        let mut conn = self.conn().await?;
        let reply: Vec<i64> = self
            .adjust
            .key(project_key(project_id))
            .key(allocations_key(project_id))
            .arg(hwset)
            .arg(delta)
            .invoke_async(&mut conn)
            .await?;
        match reply.as_slice() {
            [0, units] => Ok(Some(*units)),
            [-2, _] => Ok(None),
            other => Err(StoreError::Corrupt(format!(
                "unexpected adjust reply {:?}",
                other
            ))),
        }
    }

    async fn set_membership(
        &self,
        project_id: &str,
        username: &str,
        join: bool,
    ) -> StoreResult<Option<bool>> {
        let mut conn = self.conn().await?;
        let exists: bool = conn.exists(project_key(project_id)).await?;
        if !exists {
            return Ok(None);
        }
        if join {
            let _: () = conn.sadd(members_key(project_id), username).await?;
        } else {
            let _: () = conn.srem(members_key(project_id), username).await?;
        }
        Ok(Some(join))
    }

    async fn put_token(&self, token: &str, username: &str, ttl_secs: u64) -> StoreResult<()> {
        let mut conn = self.conn().await?;
        let _: () = conn
            .set_ex(token_key(token), username, ttl_secs as usize)
            .await?;
        Ok(())
    }

    async fn get_token(&self, token: &str) -> StoreResult<Option<String>> {
        let mut conn = self.conn().await?;
        Ok(conn.get(token_key(token)).await?)
    }

    async fn delete_token(&self, token: &str) -> StoreResult<bool> {
        let mut conn = self.conn().await?;
        let removed: i64 = conn.del(token_key(token)).await?;
        Ok(removed > 0)
    }
}
