use crate::domain::{Fingerprint, SHA1_LEN};

pub fn compute_sha1_fingerprint(der: &[u8]) -> Fingerprint {
    Fingerprint::from_digest(&sha1(der))
}

fn sha1(data: &[u8]) -> [u8; SHA1_LEN] {
    use ring::digest::{Context, SHA1_FOR_LEGACY_USE_ONLY};
    let mut ctx = Context::new(&SHA1_FOR_LEGACY_USE_ONLY);
    ctx.update(data);
    let d = ctx.finish();
    let mut out = [0u8; SHA1_LEN];
    out.copy_from_slice(d.as_ref());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_digest() {
        assert_eq!(
            compute_sha1_fingerprint(b"abc").as_str(),
            "A9:99:3E:36:47:06:81:6A:BA:3E:25:71:78:50:C2:6C:9C:D0:D8:9D"
        );
    }

    #[test]
    fn empty_input() {
        assert_eq!(
            compute_sha1_fingerprint(&[]).as_str(),
            "DA:39:A3:EE:5E:6B:4B:0D:32:55:BF:EF:95:60:18:90:AF:D8:07:09"
        );
    }
}
