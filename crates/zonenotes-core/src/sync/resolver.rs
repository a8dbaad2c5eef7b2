//! Batched record lookup and note decoding

use futures::{StreamExt as _, TryStreamExt as _};
use serde::Serialize;

use crate::error::{DecodeError, Result};
use crate::models::{Note, Record, RecordStub, RecordType, ResolvedRecord, Zone};
use crate::protocol::{decode_body, encode_body, LookupEntry, LookupRequest, LookupResponse};
use crate::transport::ZoneTransport;

/// A record that was left out of the resolved set, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordFailure {
    pub record_name: String,
    #[serde(serialize_with = "serialize_display")]
    pub error: DecodeError,
}

/// Output of resolving one change set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    pub records: Vec<ResolvedRecord>,
    pub failures: Vec<RecordFailure>,
    /// Number of lookup calls issued
    pub lookups: usize,
}

/// Looks up record stubs in fixed-size batches and decodes note payloads.
pub struct BatchRecordResolver<'a, T: ?Sized> {
    transport: &'a T,
    url: &'a str,
    batch_size: usize,
    concurrency: usize,
}

impl<'a, T: ZoneTransport + ?Sized> BatchRecordResolver<'a, T> {
    pub fn new(transport: &'a T, url: &'a str, batch_size: usize, concurrency: usize) -> Self {
        Self {
            transport,
            url,
            batch_size: batch_size.max(1),
            concurrency: concurrency.max(1),
        }
    }

    /// Resolve every stub, one lookup call per chunk of `batch_size`.
    ///
    /// Up to `concurrency` lookups run at once; results are merged in chunk
    /// order, and within a chunk in the order the server returned them.
    /// Any transport failure aborts the whole resolution.
    pub async fn resolve(&self, zone: &Zone, stubs: &[RecordStub]) -> Result<Resolution> {
        let chunks: Vec<Resolution> = futures::stream::iter(stubs.chunks(self.batch_size))
            .enumerate()
            .map(|(index, chunk)| self.lookup_chunk(zone, index, chunk))
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        let mut resolution = Resolution::default();
        for chunk in chunks {
            resolution.records.extend(chunk.records);
            resolution.failures.extend(chunk.failures);
            resolution.lookups += chunk.lookups;
        }
        Ok(resolution)
    }

    async fn lookup_chunk(
        &self,
        zone: &Zone,
        index: usize,
        chunk: &[RecordStub],
    ) -> Result<Resolution> {
        tracing::debug!("Looking up chunk {} ({} records)", index, chunk.len());

        let body = encode_body(&LookupRequest::new(zone, chunk))?;
        let response = self.transport.post_json(self.url, &body).await?;
        let response = decode_body::<LookupResponse>(response, "record lookup")?;

        let mut resolution = Resolution {
            records: Vec::with_capacity(response.records.len()),
            failures: Vec::new(),
            lookups: 1,
        };
        for entry in response.records {
            let record_name = LookupEntry::name_of(&entry);
            let resolved = LookupEntry::parse(entry)
                .and_then(LookupEntry::into_record)
                .and_then(resolve_record);

            match resolved {
                Ok(record) => resolution.records.push(record),
                Err(error) => {
                    tracing::warn!("Dropping record {}: {}", record_name, error);
                    resolution.failures.push(RecordFailure { record_name, error });
                }
            }
        }

        Ok(resolution)
    }
}

fn resolve_record(record: Record) -> std::result::Result<ResolvedRecord, DecodeError> {
    match record.record_type {
        RecordType::Note => Note::decode(record).map(ResolvedRecord::Note),
        _ => Ok(ResolvedRecord::passthrough(record)),
    }
}

fn serialize_display<S: serde::Serializer>(
    error: &DecodeError,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}
