//! Encrypting on write and decrypting on read.

mod common;

use common::{contains, pdf_with_trailer, sample_pdf, stream, A4, LETTER};
use pdf_seal::document::Document;
use pdf_seal::encryption::{apply_encryption, EncryptionAlgorithm, EncryptionParams, Permissions};
use pdf_seal::error::{Error, ErrorKind};
use pdf_seal::parser_config::ParseOptions;

const ALGORITHMS: [EncryptionAlgorithm; 4] = [
    EncryptionAlgorithm::Rc4_40,
    EncryptionAlgorithm::Rc4_128,
    EncryptionAlgorithm::Aes128,
    EncryptionAlgorithm::Aes256,
];

fn contents(doc: &Document) -> Vec<Vec<u8>> {
    doc.pages()
        .map(|p| {
            p.unwrap()
                .content_refs()
                .into_iter()
                .flat_map(|r| doc.decoded_stream(r).unwrap())
                .collect()
        })
        .collect()
}

/// Sample document with an `/Info` title.
fn titled_pdf() -> Vec<u8> {
    let objects = vec![
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 595 842] /Contents 4 0 R >>".to_string(),
        stream("", "BT /F1 12 Tf 72 72 Td (Secret chapter) Tj ET"),
        "<< /Title (Secret handbook) >>".to_string(),
    ];
    pdf_with_trailer(&objects, "/Info 5 0 R ")
}

fn seal(input: &[u8], params: &EncryptionParams) -> Vec<u8> {
    let mut doc = Document::parse(input, &ParseOptions::default()).unwrap();
    apply_encryption(&mut doc, params).unwrap();
    doc.serialize().unwrap()
}

mod password_gate {
    use super::*;

    #[test]
    fn test_missing_password() {
        let sealed = seal(&titled_pdf(), &EncryptionParams::new("reader"));
        let err = Document::parse(&sealed, &ParseOptions::default()).unwrap_err();
        assert!(matches!(err, Error::PasswordRequired));
        assert_eq!(err.kind(), ErrorKind::UnsupportedFeature);
    }

    #[test]
    fn test_wrong_password() {
        let sealed = seal(&titled_pdf(), &EncryptionParams::new("reader"));
        let options = ParseOptions::default().with_password("intruder");
        let err = Document::parse(&sealed, &options).unwrap_err();
        assert!(matches!(err, Error::IncorrectPassword));
    }

    #[test]
    fn test_every_algorithm_round_trips() {
        let input = titled_pdf();
        let expected = contents(&Document::parse(&input, &ParseOptions::default()).unwrap());
        for algorithm in ALGORITHMS {
            let params = EncryptionParams::new("reader").with_algorithm(algorithm);
            let sealed = seal(&input, &params);
            assert!(!contains(&sealed, b"Secret"), "{} leaks plaintext", algorithm);

            let doc = Document::parse(&sealed, &ParseOptions::default().with_password("reader"))
                .unwrap_or_else(|e| panic!("{}: {}", algorithm, e));
            assert_eq!(contents(&doc), expected, "{}", algorithm);
            let info = doc.get(doc.trailer().info.unwrap()).unwrap();
            assert_eq!(
                info.as_dict().unwrap()["Title"].as_string(),
                Some(&b"Secret handbook"[..]),
                "{}",
                algorithm
            );
            assert!(doc.encryption().is_none());
            assert!(doc.trailer().encrypt.is_none());
        }
    }

    #[test]
    fn test_owner_password_also_opens() {
        for algorithm in ALGORITHMS {
            let params = EncryptionParams::new("reader")
                .with_owner_password("publisher")
                .with_algorithm(algorithm);
            let sealed = seal(&sample_pdf(&[A4]), &params);
            let doc = Document::parse(&sealed, &ParseOptions::default().with_password("publisher"));
            assert!(doc.is_ok(), "{}", algorithm);
        }
    }

    #[test]
    fn test_reseal_with_new_password() {
        let first = seal(&sample_pdf(&[A4, LETTER]), &EncryptionParams::new("one"));
        let second = seal_with_input_password(&first, "one", &EncryptionParams::new("two"));

        let options = ParseOptions::default().with_password("one");
        assert!(matches!(Document::parse(&second, &options), Err(Error::IncorrectPassword)));
        let doc = Document::parse(&second, &ParseOptions::default().with_password("two")).unwrap();
        assert_eq!(doc.page_count(), 2);
    }

    fn seal_with_input_password(input: &[u8], password: &str, params: &EncryptionParams) -> Vec<u8> {
        let mut doc = Document::parse(input, &ParseOptions::default().with_password(password)).unwrap();
        apply_encryption(&mut doc, params).unwrap();
        doc.serialize().unwrap()
    }
}

mod output {
    use super::*;

    #[test]
    fn test_rc4_is_deterministic_for_a_fixed_file_id() {
        let run = || {
            let mut doc = Document::parse(&titled_pdf(), &ParseOptions::default()).unwrap();
            doc.trailer_mut().id = Some((vec![7; 16], vec![7; 16]));
            apply_encryption(&mut doc, &EncryptionParams::new("reader")).unwrap();
            doc.serialize().unwrap()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_aes_uses_fresh_ivs() {
        let params = EncryptionParams::new("reader").with_algorithm(EncryptionAlgorithm::Aes128);
        let run = || {
            let mut doc = Document::parse(&titled_pdf(), &ParseOptions::default()).unwrap();
            doc.trailer_mut().id = Some((vec![7; 16], vec![7; 16]));
            apply_encryption(&mut doc, &params).unwrap();
            doc.serialize().unwrap()
        };
        let (a, b) = (run(), run());
        assert_ne!(a, b);
        for sealed in [a, b] {
            assert!(Document::parse(&sealed, &ParseOptions::default().with_password("reader")).is_ok());
        }
    }

    #[test]
    fn test_encrypt_dictionary_and_version() {
        let params = EncryptionParams::new("reader")
            .with_permissions(Permissions::empty())
            .with_algorithm(EncryptionAlgorithm::Aes256);
        let sealed = seal(&sample_pdf(&[A4]), &params);
        assert!(sealed.starts_with(b"%PDF-1.7\n"));
        assert!(contains(&sealed, b"/Filter /Standard"));
        assert!(contains(&sealed, b"/P -3904"));
        assert!(contains(&sealed, b"/CFM /AESV3"));
        assert!(contains(&sealed, b"/Encrypt "));
        assert!(contains(&sealed, b"/ID ["));
    }

    #[test]
    fn test_rejected_params_leave_document_untouched() {
        let mut doc = Document::parse(&sample_pdf(&[A4]), &ParseOptions::default()).unwrap();
        let before = doc.serialize().unwrap();

        let err = apply_encryption(&mut doc, &EncryptionParams::new("")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::WeakOrEmptyPassword);
        let err = apply_encryption(&mut doc, &EncryptionParams::new("암호")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedAlgorithm);

        assert!(doc.encryption().is_none());
        assert_eq!(doc.serialize().unwrap(), before);
    }
}
