#![no_main]

use libfuzzer_sys::fuzz_target;
use logmirror_ingest::wire::{FetchResponse, decode_record};

fuzz_target!(|data: &[u8]| {
    // 숫자/문자열 혼용 필드를 포함한 응답 본문 역직렬화가 패닉 없이 끝나야 함
    if let Ok(response) = serde_json::from_slice::<FetchResponse>(data) {
        if let Some(data) = response.data {
            for value in data.records {
                if let Ok(record) = decode_record(value) {
                    let _ = record.into_raw(1);
                }
            }
        }
    }
});
