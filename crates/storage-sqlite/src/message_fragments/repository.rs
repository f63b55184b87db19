//! Repository for message fragments.
//!
//! Implements `ChunkStoreTrait` from querystream-core. Appends go through the
//! writer actor; reads use pooled connections.

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sqlite::SqliteConnection;
use log::{debug, warn};
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

use querystream_core::constants::LARGE_FRAGMENT_WARN_BYTES;
use querystream_core::errors::Result;
use querystream_core::{ChunkStoreTrait, ChunkType, FragmentId, NewFragment, PhysicalFragment};

use crate::db::{get_connection, WriteHandle};
use crate::errors::IntoCore;
use crate::schema::message_fragments;

use super::model::MessageFragmentDB;

/// SQLite implementation of the fragment store.
pub struct FragmentRepository {
    pool: Arc<Pool<ConnectionManager<SqliteConnection>>>,
    writer: WriteHandle,
}

impl FragmentRepository {
    pub fn new(pool: Arc<Pool<ConnectionManager<SqliteConnection>>>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }

    /// Distinct message ids that have stored fragments.
    pub fn list_message_ids(&self) -> Result<Vec<String>> {
        let mut conn = get_connection(&self.pool)?;
        message_fragments::table
            .select(message_fragments::message_id)
            .distinct()
            .order(message_fragments::message_id.asc())
            .load::<String>(&mut conn)
            .into_core()
    }
}

#[async_trait]
impl ChunkStoreTrait for FragmentRepository {
    async fn append(&self, fragment: NewFragment) -> Result<FragmentId> {
        let row = MessageFragmentDB::from_new(&fragment, Uuid::new_v4().to_string(), Utc::now())?;

        if row.payload_len() > LARGE_FRAGMENT_WARN_BYTES {
            warn!(
                "Large fragment for message {} ({}#{} part {}): {} bytes",
                row.message_id,
                row.chunk_type,
                row.sequence,
                row.fragment_index,
                row.payload_len()
            );
        }

        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<FragmentId> {
                let inserted = diesel::insert_into(message_fragments::table)
                    .values(&row)
                    .on_conflict((
                        message_fragments::message_id,
                        message_fragments::chunk_type,
                        message_fragments::sequence,
                        message_fragments::fragment_index,
                    ))
                    .do_nothing()
                    .execute(conn)
                    .into_core()?;

                if inserted == 0 {
                    debug!(
                        "Fragment {}#{} part {} of message {} already stored",
                        row.chunk_type, row.sequence, row.fragment_index, row.message_id
                    );
                }

                message_fragments::table
                    .filter(message_fragments::message_id.eq(&row.message_id))
                    .filter(message_fragments::chunk_type.eq(&row.chunk_type))
                    .filter(message_fragments::sequence.eq(row.sequence))
                    .filter(message_fragments::fragment_index.eq(row.fragment_index))
                    .select(message_fragments::id)
                    .first::<String>(conn)
                    .into_core()
            })
            .await
    }

    fn read_all(&self, message_id: &str) -> Result<Vec<PhysicalFragment>> {
        let mut conn = get_connection(&self.pool)?;

        let rows = message_fragments::table
            .filter(message_fragments::message_id.eq(message_id))
            .order((
                message_fragments::sequence.asc(),
                message_fragments::fragment_index.asc(),
                message_fragments::chunk_type.asc(),
            ))
            .select(MessageFragmentDB::as_select())
            .load::<MessageFragmentDB>(&mut conn)
            .into_core()?;

        let mut fragments = Vec::with_capacity(rows.len());
        for row in rows {
            let id = row.id.clone();
            match PhysicalFragment::try_from(row) {
                Ok(fragment) => fragments.push(fragment),
                Err(e) => warn!(
                    "Skipping unreadable fragment {} of message {}: {}",
                    id, message_id, e
                ),
            }
        }
        Ok(fragments)
    }

    async fn delete_all(&self, message_id: &str) -> Result<usize> {
        let message_id = message_id.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                diesel::delete(
                    message_fragments::table
                        .filter(message_fragments::message_id.eq(&message_id)),
                )
                .execute(conn)
                .into_core()
            })
            .await
    }

    fn count_by_type(&self, message_id: &str) -> Result<BTreeMap<ChunkType, usize>> {
        let mut conn = get_connection(&self.pool)?;

        let rows = message_fragments::table
            .filter(message_fragments::message_id.eq(message_id))
            .group_by(message_fragments::chunk_type)
            .select((
                message_fragments::chunk_type,
                diesel::dsl::count(message_fragments::id),
            ))
            .load::<(String, i64)>(&mut conn)
            .into_core()?;

        let mut counts = BTreeMap::new();
        for (chunk_type, count) in rows {
            counts.insert(chunk_type.parse::<ChunkType>()?, count.max(0) as usize);
        }
        Ok(counts)
    }
}
