//! The ordered sequence of authored journal entries.

use tracing::{debug, info};

use infinity_order::{next_position, ReorderRequest};
use infinity_store::{BlobStore, Filter, Query, RecordStore, Table};
use infinity_types::{Entry, EntryId};

use crate::error::{LedgerError, LedgerResult};
use crate::ledger::{
    decode_rows, encode_row, is_position_clash, MembershipLedger, APPEND_ATTEMPTS, ENTRIES_SCOPE,
};

impl<S: RecordStore, B: BlobStore> MembershipLedger<S, B> {
    /// Create an entry at the end of the journal.
    pub async fn create_entry(
        &self,
        title: &str,
        description: Option<&str>,
        created_by: &str,
    ) -> LedgerResult<Entry> {
        let mut entry = Entry::authored(title, description, created_by, 0)?;

        let query = Query::from(Table::Entries)
            .is_null("bucket")
            .order_by_desc("position")
            .limit(1);
        let mut attempt = 1;
        loop {
            let last: Vec<Entry> = decode_rows(Table::Entries, self.store.select(&query).await?)?;
            entry.position = next_position(last.iter().map(|e| e.position))?;
            match self
                .store
                .insert(Table::Entries, vec![encode_row(&entry)?])
                .await
            {
                Ok(_) => break,
                Err(e) if is_position_clash(&e) && attempt < APPEND_ATTEMPTS => {
                    debug!(attempt, "entry position taken, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
        info!(entry = %entry.id, position = entry.position, "entry created");
        Ok(entry)
    }

    /// Authored entries in journal order. The standalone bucket is not
    /// part of the sequence.
    pub async fn list_entries(&self) -> LedgerResult<Vec<Entry>> {
        let query = Query::from(Table::Entries)
            .is_null("bucket")
            .order_by("position");
        decode_rows(Table::Entries, self.store.select(&query).await?)
    }

    /// Move the entry at `from_index` to `to_index` and renumber `0..N`.
    pub async fn reorder_entries(
        &self,
        from_index: usize,
        to_index: usize,
    ) -> LedgerResult<Vec<Entry>> {
        let version = self.store.scope_version(ENTRIES_SCOPE).await?;
        let entries = self.list_entries().await?;
        self.commit_reorder(
            ENTRIES_SCOPE,
            version,
            Table::Entries,
            entries,
            ReorderRequest::new(from_index, to_index),
            |id| vec![Filter::eq("id", *id)],
        )
        .await
    }

    /// Delete an entry and every photo it owns. Returns `false` if it did
    /// not exist.
    pub async fn delete_entry(&self, entry_id: EntryId) -> LedgerResult<bool> {
        let Some(entry) = self.find_entry(entry_id).await? else {
            return Ok(false);
        };
        if entry.is_standalone_bucket() {
            return Err(LedgerError::ProtectedEntry(entry_id));
        }

        let photos = self.entry_photos(entry_id).await?;
        for photo in &photos {
            self.delete_photo(photo.id).await?;
        }
        self.store
            .delete(Table::Entries, &[Filter::eq("id", entry_id)])
            .await?;
        info!(entry = %entry_id, photos = photos.len(), "entry deleted");
        Ok(true)
    }
}
