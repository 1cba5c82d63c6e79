//! Testes da camada de syscalls

#![cfg(test)]

use super::{create_test_ipc, create_test_process, enter, spawn, wait_until};
use crate::core::object::ObjectType;
use crate::ipc::{
    ClientInfo, Ipc, IpcFlags, IpcMessage, KMessage, MessageFlags, Port, IPC_DATA_MAX,
    PROCESS_ROOT_PORT, THREAD_EXCEPTION_PORT,
};
use crate::sched::Process;
use crate::security::SecurityContext;
use crate::syscall::error::SysError;
use crate::syscall::handle::{HandleId, INVALID_HANDLE};
use crate::syscall::{
    sys_connection_open, sys_connection_receive, sys_connection_receive_data,
    sys_connection_receive_handle, sys_connection_send, sys_handle_close, sys_port_create,
    sys_port_listen,
};
use std::sync::{Arc, Mutex};

/// Handles de uma conexão estabelecida pela porta raiz do cliente.
struct Established {
    port: HandleId,
    server_conn: HandleId,
    client_conn: HandleId,
}

/// Servidor cria a porta, cliente abre pela `PROCESS_ROOT_PORT`, servidor
/// aceita. Retorna com a thread atual dentro do servidor.
fn establish(ipc: &Arc<Ipc>, server: &Arc<Process>, client: &Arc<Process>) -> Established {
    enter(server);
    let port = sys_port_create(ipc).unwrap();
    let port_object = server.lookup_handle(port, Some(ObjectType::Port)).unwrap();
    client.set_root_port(port_object.as_port().cloned());

    let opener_ipc = Arc::clone(ipc);
    let opener = spawn(client, move || {
        sys_connection_open(&opener_ipc, PROCESS_ROOT_PORT, -1)
    });

    let mut info = ClientInfo::default();
    let server_conn = sys_port_listen(ipc, port, Some(&mut info), -1).unwrap();
    assert_eq!(info.pid, client.id());

    let client_conn = opener.join().unwrap().unwrap();
    Established {
        port,
        server_conn,
        client_conn,
    }
}

fn envelope(id: u32, size: usize, flags: MessageFlags) -> IpcMessage {
    IpcMessage {
        flags,
        size: size as u16,
        ..IpcMessage::new(id)
    }
}

#[test]
fn test_attachments_are_delivered_at_most_once() {
    let ipc = create_test_ipc();
    let server = create_test_process(100);
    let client = create_test_process(200);
    let conn = establish(&ipc, &server, &client);

    // Cliente anexa 100 bytes e uma porta própria.
    enter(&client);
    let gift = sys_port_create(&ipc).unwrap();
    let payload: Vec<u8> = (0..100u8).collect();
    let msg = envelope(7, payload.len(), MessageFlags::HANDLE);
    sys_connection_send(&ipc, conn.client_conn, &msg, Some(&payload[..]), gift, 0).unwrap();

    enter(&server);
    let mut received = IpcMessage::default();
    let mut security = SecurityContext::default();
    sys_connection_receive(&ipc, conn.server_conn, &mut received, Some(&mut security), 0)
        .unwrap();
    assert_eq!(received.id, 7);
    assert_eq!(received.size, 100);
    assert!(received.flags.contains(MessageFlags::HANDLE));
    assert_eq!(security, SecurityContext::user(200, 200));

    let mut buf = [0u8; 128];
    assert_eq!(
        sys_connection_receive_data(&ipc, conn.server_conn, Some(&mut buf[..])),
        Ok(100)
    );
    assert_eq!(&buf[..100], &payload[..]);

    let mut port_id = INVALID_HANDLE;
    sys_connection_receive_handle(&ipc, conn.server_conn, Some(&mut port_id)).unwrap();
    let gifted = server.lookup_handle(port_id, Some(ObjectType::Port)).unwrap();
    let original = client.lookup_handle(gift, Some(ObjectType::Port)).unwrap();
    assert_eq!(gifted.koid(), original.koid());

    assert_eq!(
        sys_connection_receive_data(&ipc, conn.server_conn, Some(&mut buf[..])),
        Err(SysError::NotFound)
    );
    assert_eq!(
        sys_connection_receive_handle(&ipc, conn.server_conn, Some(&mut port_id)),
        Err(SysError::NotFound)
    );

    // A porta recebida não é do servidor.
    assert_eq!(
        sys_port_listen(&ipc, port_id, None, 0),
        Err(SysError::AccessDenied)
    );
}

#[test]
fn test_size_bound() {
    let ipc = create_test_ipc();
    let server = create_test_process(100);
    let client = create_test_process(200);
    let conn = establish(&ipc, &server, &client);

    enter(&client);
    let payload = vec![0u8; IPC_DATA_MAX + 1];
    let msg = envelope(1, payload.len(), MessageFlags::empty());
    assert_eq!(
        sys_connection_send(&ipc, conn.client_conn, &msg, Some(&payload[..]), INVALID_HANDLE, 0),
        Err(SysError::TooLarge)
    );

    let payload = vec![0u8; IPC_DATA_MAX];
    let msg = envelope(2, payload.len(), MessageFlags::empty());
    sys_connection_send(&ipc, conn.client_conn, &msg, Some(&payload[..]), INVALID_HANDLE, 0)
        .unwrap();

    enter(&server);
    let mut received = IpcMessage::default();
    sys_connection_receive(&ipc, conn.server_conn, &mut received, None, 0).unwrap();
    assert_eq!(received.id, 2);
    assert_eq!(
        sys_connection_receive(&ipc, conn.server_conn, &mut received, None, 0),
        Err(SysError::WouldBlock)
    );
}

#[test]
fn test_send_argument_validation() {
    let ipc = create_test_ipc();
    let server = create_test_process(100);
    let client = create_test_process(200);
    let conn = establish(&ipc, &server, &client);
    enter(&client);

    let send = |msg: &IpcMessage, data: Option<&[u8]>, attached: HandleId| {
        sys_connection_send(&ipc, conn.client_conn, msg, data, attached, 0)
    };
    let bytes = [1u8; 16];

    // Tamanho sem dados, dados sem tamanho, dados curtos.
    assert_eq!(
        send(&envelope(1, 8, MessageFlags::empty()), None, INVALID_HANDLE),
        Err(SysError::InvalidArgument)
    );
    assert_eq!(
        send(&envelope(1, 0, MessageFlags::empty()), Some(&bytes[..]), INVALID_HANDLE),
        Err(SysError::InvalidArgument)
    );
    assert_eq!(
        send(&envelope(1, 32, MessageFlags::empty()), Some(&bytes[..]), INVALID_HANDLE),
        Err(SysError::InvalidArgument)
    );

    // Handles anexados.
    assert_eq!(
        send(&envelope(1, 0, MessageFlags::HANDLE), None, 12345),
        Err(SysError::InvalidHandle)
    );
    assert_eq!(
        send(&envelope(1, 0, MessageFlags::HANDLE), None, conn.client_conn),
        Err(SysError::AccessDenied)
    );
    assert_eq!(
        send(&envelope(1, 0, MessageFlags::empty()), None, conn.client_conn),
        Err(SysError::InvalidArgument)
    );

    // Nada foi enfileirado.
    enter(&server);
    let mut received = IpcMessage::default();
    assert_eq!(
        sys_connection_receive(&ipc, conn.server_conn, &mut received, None, 0),
        Err(SysError::WouldBlock)
    );
    assert_eq!(ipc.message_cache().live(), 0);
}

#[test]
fn test_listen_retry_after_handle_exhaustion() {
    let ipc = create_test_ipc();
    let server = Process::with_handle_capacity(100, SecurityContext::user(100, 100), 2);
    let client = create_test_process(200);

    enter(&server);
    let port = sys_port_create(&ipc).unwrap();
    let filler = sys_port_create(&ipc).unwrap();
    let port_object = server.lookup_handle(port, Some(ObjectType::Port)).unwrap();
    let port_ref = Arc::clone(port_object.as_port().unwrap());
    client.set_root_port(Some(Arc::clone(&port_ref)));

    let opener_ipc = Arc::clone(&ipc);
    let opener = spawn(&client, move || {
        sys_connection_open(&opener_ipc, PROCESS_ROOT_PORT, -1)
    });
    wait_until(|| port_ref.waiting_count() == 1);

    assert_eq!(
        sys_port_listen(&ipc, port, None, 0),
        Err(SysError::NoHandles)
    );
    assert_eq!(port_ref.waiting_count(), 1);

    sys_handle_close(&ipc, filler).unwrap();
    let server_conn = sys_port_listen(&ipc, port, None, 0).unwrap();
    let client_conn = opener.join().unwrap().unwrap();

    let server_koid = server.lookup_handle(server_conn, None).unwrap().koid();
    let client_koid = client.lookup_handle(client_conn, None).unwrap().koid();
    assert_eq!(server_koid, client_koid);
}

#[test]
fn test_receive_handle_without_slot_keeps_pending() {
    let ipc = create_test_ipc();
    let server = Process::with_handle_capacity(100, SecurityContext::user(100, 100), 2);
    let client = create_test_process(200);
    let conn = establish(&ipc, &server, &client);

    enter(&client);
    let gift = sys_port_create(&ipc).unwrap();
    let msg = envelope(3, 0, MessageFlags::HANDLE);
    sys_connection_send(&ipc, conn.client_conn, &msg, None, gift, 0).unwrap();

    enter(&server);
    let mut received = IpcMessage::default();
    sys_connection_receive(&ipc, conn.server_conn, &mut received, None, 0).unwrap();

    let mut out = INVALID_HANDLE;
    assert_eq!(
        sys_connection_receive_handle(&ipc, conn.server_conn, Some(&mut out)),
        Err(SysError::NoHandles)
    );
    assert_eq!(out, INVALID_HANDLE);

    // Descarta: agora não há mais nada pendente.
    sys_connection_receive_handle(&ipc, conn.server_conn, None).unwrap();
    assert_eq!(
        sys_connection_receive_handle(&ipc, conn.server_conn, None),
        Err(SysError::NotFound)
    );
}

#[test]
fn test_receive_data_buffer_rules() {
    let ipc = create_test_ipc();
    let server = create_test_process(100);
    let client = create_test_process(200);
    let conn = establish(&ipc, &server, &client);

    enter(&client);
    let payload = [9u8; 64];
    for id in 0..2 {
        let msg = envelope(id, payload.len(), MessageFlags::empty());
        sys_connection_send(&ipc, conn.client_conn, &msg, Some(&payload[..]), INVALID_HANDLE, 0)
            .unwrap();
    }

    enter(&server);
    let mut received = IpcMessage::default();
    sys_connection_receive(&ipc, conn.server_conn, &mut received, None, 0).unwrap();

    let mut small = [0u8; 8];
    assert_eq!(
        sys_connection_receive_data(&ipc, conn.server_conn, Some(&mut small[..])),
        Err(SysError::InvalidArgument)
    );
    // Descartar devolve o tamanho e consome os dados.
    assert_eq!(sys_connection_receive_data(&ipc, conn.server_conn, None), Ok(64));
    assert_eq!(
        sys_connection_receive_data(&ipc, conn.server_conn, None),
        Err(SysError::NotFound)
    );

    // Um novo receive descarta o que ficou pendente.
    sys_connection_receive(&ipc, conn.server_conn, &mut received, None, 0).unwrap();
    assert_eq!(received.id, 1);
    let reply = IpcMessage::with_args(9, [1; 6]);
    sys_connection_send(&ipc, conn.server_conn, &reply, None, INVALID_HANDLE, 0).unwrap();
    assert_eq!(
        sys_connection_receive_data(&ipc, conn.server_conn, None),
        Err(SysError::NotFound)
    );
}

#[test]
fn test_handle_close_hangs_up_remote() {
    let ipc = create_test_ipc();
    let server = create_test_process(100);
    let client = create_test_process(200);
    let conn = establish(&ipc, &server, &client);

    enter(&client);
    sys_handle_close(&ipc, conn.client_conn).unwrap();
    assert_eq!(
        sys_handle_close(&ipc, conn.client_conn),
        Err(SysError::InvalidHandle)
    );

    enter(&server);
    let mut received = IpcMessage::default();
    assert_eq!(
        sys_connection_receive(&ipc, conn.server_conn, &mut received, None, -1),
        Err(SysError::ConnHungup)
    );
    assert_eq!(
        sys_connection_send(&ipc, conn.server_conn, &received, None, INVALID_HANDLE, 0),
        Err(SysError::ConnHungup)
    );

    // Fechar a porta abandona a porta: novos opens voltam hangup.
    sys_handle_close(&ipc, conn.port).unwrap();
    enter(&client);
    assert_eq!(
        sys_connection_open(&ipc, PROCESS_ROOT_PORT, 0),
        Err(SysError::ConnHungup)
    );
}

#[test]
fn test_handle_type_checks() {
    let ipc = create_test_ipc();
    let server = create_test_process(100);
    let client = create_test_process(200);
    let conn = establish(&ipc, &server, &client);

    enter(&server);
    let mut received = IpcMessage::default();
    assert_eq!(
        sys_port_listen(&ipc, conn.server_conn, None, 0),
        Err(SysError::InvalidHandle)
    );
    assert_eq!(
        sys_connection_receive(&ipc, conn.port, &mut received, None, 0),
        Err(SysError::InvalidHandle)
    );
    assert_eq!(
        sys_connection_open(&ipc, conn.server_conn, 0),
        Err(SysError::InvalidHandle)
    );
}

#[test]
fn test_well_known_ports() {
    let ipc = create_test_ipc();
    let thread = enter(&create_test_process(300));

    assert_eq!(
        sys_connection_open(&ipc, PROCESS_ROOT_PORT, 0),
        Err(SysError::NotFound)
    );
    assert_eq!(
        sys_connection_open(&ipc, THREAD_EXCEPTION_PORT, 0),
        Err(SysError::NotFound)
    );
    assert_eq!(sys_connection_open(&ipc, -5, 0), Err(SysError::InvalidArgument));

    // Porta de exceções do kernel: aceita na hora, entrega com FORCE.
    let accepted = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&accepted);
    let port = Port::new_kernel(&ipc, move |server, _| {
        sink.lock().unwrap().push(server);
        Ok(())
    })
    .unwrap();
    thread.set_exception_port(Some(Arc::clone(&port)));

    let handle = sys_connection_open(&ipc, THREAD_EXCEPTION_PORT, 0).unwrap();
    let kernel_side = accepted.lock().unwrap().pop().unwrap();

    let report = KMessage::alloc(&ipc).unwrap();
    report.set_envelope(0xE, [14, 0, 0, 0, 0, 0]);
    kernel_side.send(&report, IpcFlags::FORCE, 0).unwrap();

    let mut received = IpcMessage::default();
    sys_connection_receive(&ipc, handle, &mut received, None, 0).unwrap();
    assert_eq!(received.id, 0xE);
    assert_eq!(received.args[0], 14);
}
