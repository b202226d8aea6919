pub mod orders;
pub mod tokens;
pub mod chains;
pub mod transactions;

pub use orders::{ApiAdditionalInfo, Order, OrderBucket, OrderId, OrderKind, OrderObject, OrderStatus};
pub use tokens::Token;
pub use chains::{ChainId, SupportedChain};
pub use transactions::{
    Approval, EnhancedTransaction, HashType, Presign, SafeMultisigTransaction, TransactionReceipt,
    TxHash,
};
