/// Declares a structural log record type: a plain struct of
/// [`crate::serial::LogField`] members plus generated `encode`/
/// `decode_body` methods. This is the crate's substitute for BDB's
/// `gen_rec.awk`-generated `*_log`/`*_print`/`*_read` function triples
/// (see the Design Notes in SPEC_FULL.md) — a macro instead of a
/// build-time code generator, since this is a from-scratch Rust port
/// rather than a C preprocessor pipeline.
macro_rules! log_record {
    (
        $(#[$meta:meta])*
        $name:ident, $rectype:expr, { $($field:ident : $ty:ty),* $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $name {
            $(pub $field: $ty,)*
        }

        impl $name {
            pub const RECTYPE: crate::logrec::envelope::RecType = $rectype;

            /// Encodes the envelope followed by this record's body,
            /// asserting the written length matches the size computed
            /// by summing each field's `field_size()` up front.
            pub fn encode(&self, txn_num: u32, prev_lsn: crate::lsn::Lsn) -> crate::error::Result<Vec<u8>> {
                use crate::serial::LogField;
                let body_size: usize = 0 $(+ self.$field.field_size())*;
                let total = crate::logrec::envelope::Envelope::ENCODED_LEN + body_size;
                let mut w = crate::serial::ByteWriter::with_capacity(total);
                let env = crate::logrec::envelope::Envelope {
                    rectype: Self::RECTYPE,
                    txn_num,
                    prev_lsn,
                };
                env.write(&mut w);
                $(self.$field.write_field(&mut w);)*
                w.finish()
            }

            /// Decodes this record's body. The envelope must already
            /// have been consumed by the caller (the registry does
            /// this once and dispatches on its `rectype`).
            pub fn decode_body(r: &mut crate::serial::ByteReader) -> crate::error::Result<Self> {
                use crate::serial::LogField;
                Ok(Self {
                    $($field: LogField::read_field(r)?,)*
                })
            }

            pub fn print(&self) -> String {
                format!("{:?}", self)
            }
        }
    };
}

pub(crate) use log_record;
