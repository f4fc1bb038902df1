pub mod bill;
pub mod draft;
pub mod payment_method;

pub use bill::{
    Bill, BillRow, LineItem, NewBill, NewPayment, PaymentLine, PaymentRecord,
    MAX_PRICE, MAX_QUANTITY,
};
pub use draft::{BillDraft, DraftError, DraftLineItem};
pub use payment_method::PaymentMethod;
